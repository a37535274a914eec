//! Positional identifier newtypes.
//!
//! Schedules and conditions are identified by their position in the owning
//! sequence, which is also the order in which they are persisted. Removing an
//! element shifts the identifiers of every element after it.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wrap a position.
            #[must_use]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Access the position.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Position of a [`Schedule`](crate::schedule::Schedule) in the scheduler collection.
    ScheduleId
);

define_id!(
    /// Position of a [`Condition`](crate::schedule::Condition) inside its schedule.
    ConditionId
);
