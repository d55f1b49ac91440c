//! Per-event handlers, grouped by the entity they mutate

mod channel;
mod guild;
mod member;
mod message;
mod presence;
mod relationship;
mod session;

#[cfg(test)]
pub(crate) mod test_support;
