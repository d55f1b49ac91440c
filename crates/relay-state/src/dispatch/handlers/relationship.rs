//! RELATIONSHIP_ADD and RELATIONSHIP_REMOVE

use relay_core::{DomainError, Relationship, RelationshipType};

use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::payloads::{RelationshipPayload, UserPayload};
use crate::events::ClientEvent;
use crate::store::EntityStore;

pub(super) fn relationship_from_payload(
    store: &EntityStore,
    payload: &RelationshipPayload,
    user: &UserPayload,
) -> Relationship {
    Relationship {
        user: store.upsert_user(user),
        kind: RelationshipType::from(payload.kind),
        nickname: payload.nickname.clone(),
    }
}

impl EventDispatcher {
    pub(crate) fn on_relationship_add(&self, payload: &RelationshipPayload) -> StateResult<()> {
        let user = payload
            .user
            .as_ref()
            .ok_or(DomainError::MissingField("user"))?;
        let store = &self.ctx.store;
        let relationship = relationship_from_payload(store, payload, user);

        let event = match store.add_relationship(user.id, relationship.clone()) {
            Some(before) => ClientEvent::RelationshipUpdate {
                before,
                after: relationship,
            },
            None => ClientEvent::RelationshipAdd(relationship),
        };
        self.ctx.events.emit(event);
        Ok(())
    }

    pub(crate) fn on_relationship_remove(&self, payload: &RelationshipPayload) -> StateResult<()> {
        let user_id = payload.user.as_ref().map_or(payload.id, |u| u.id);
        match self.ctx.store.remove_relationship(user_id) {
            Some(relationship) => self
                .ctx
                .events
                .emit(ClientEvent::RelationshipRemove(relationship)),
            None => tracing::debug!(user_id = %user_id, "Removing unknown relationship"),
        }
        Ok(())
    }
}
