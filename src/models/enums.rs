use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(SlotState {
    Available => "available",
    Booked => "booked",
});

str_enum!(EntityKind {
    Date => "builtin.datetimeV2.date",
    Time => "builtin.datetimeV2.time",
    DateTime => "builtin.datetimeV2.datetime",
    DateRange => "builtin.datetimeV2.daterange",
    TimeRange => "builtin.datetimeV2.timerange",
    DateTimeRange => "builtin.datetimeV2.datetimerange",
    DoctorType => "DoctorType",
    AppointmentReason => "AppointmentReason",
});
