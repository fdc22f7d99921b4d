use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a registered visitor.
    VisitorId
);

uuid_id!(
    /// Identifier of a single visit episode.
    VisitId
);

uuid_id!(
    /// Identifier of a staff user (host, operator, admin).
    UserId
);

uuid_id!(
    /// Identifier of a consent record.
    ConsentRecordId
);

uuid_id!(
    /// Identifier of an audit trail entry.
    AuditEntryId
);

uuid_id!(
    /// Identifier of a live realtime connection.
    ConnectionId
);

#[cfg(test)]
mod tests {
    use super::{VisitId, VisitorId};

    #[test]
    fn identifiers_format_as_uuid() {
        let visitor_id = VisitorId::new();
        assert_eq!(visitor_id.to_string().len(), 36);
    }

    #[test]
    fn identifiers_round_trip_through_uuid() {
        let visit_id = VisitId::new();
        assert_eq!(VisitId::from_uuid(visit_id.as_uuid()), visit_id);
    }
}
