pub mod basket;
pub mod breakdown;
pub mod commission;
pub mod discount;
pub mod hardware;
pub mod money;
pub mod period;
pub mod promotion;
pub mod tariff;

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id!(CatalogVersion);
string_id!(TariffId);
string_id!(HardwareId);
string_id!(PromoId);
string_id!(DiscountRuleId);
string_id!(CommissionRuleId);
string_id!(SubVariantRuleId);
string_id!(LineId);
string_id!(OfferId);
