//! Relationship entity - friends, blocks, and pending requests of the session user

use super::user::UserRef;

/// Relationship kind as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    Friend,
    Blocked,
    IncomingRequest,
    OutgoingRequest,
    Unknown(i32),
}

impl From<i32> for RelationshipType {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Friend,
            2 => Self::Blocked,
            3 => Self::IncomingRequest,
            4 => Self::OutgoingRequest,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Relationship {
    pub user: UserRef,
    pub kind: RelationshipType,
    pub nickname: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_type_from_i32() {
        assert_eq!(RelationshipType::from(1), RelationshipType::Friend);
        assert_eq!(RelationshipType::from(4), RelationshipType::OutgoingRequest);
        assert_eq!(RelationshipType::from(9), RelationshipType::Unknown(9));
    }
}
