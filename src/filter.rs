//! Payload filter for subscribers.

use std::borrow::Cow;

use crate::ws::{Opcode, Payload};

/// Type implements this trait can check if a payload is wanted.
pub trait Filter {
    /// true if payload is wanted, otherwise false.
    fn filter_payload(&self, payload: &Payload) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Payload) -> bool,
{
    fn filter_payload(&self, payload: &Payload) -> bool {
        self(payload)
    }
}

/// Negative wrapper of a filter.
#[derive(Debug, Copy, Clone)]
pub struct Not<F> {
    filter: F,
}

impl<F> Filter for Not<F>
where
    F: Filter,
{
    fn filter_payload(&self, payload: &Payload) -> bool {
        !self.filter.filter_payload(payload)
    }
}

/// If and only if a and b both pass, this filter will pass.
#[derive(Debug, Copy, Clone)]
pub struct And<FA, FB> {
    a: FA,
    b: FB,
}

impl<FA, FB> Filter for And<FA, FB>
where
    FA: Filter,
    FB: Filter,
{
    fn filter_payload(&self, payload: &Payload) -> bool {
        self.a.filter_payload(payload) && self.b.filter_payload(payload)
    }
}

/// If a or b pass, this filter will pass.
#[derive(Debug, Copy, Clone)]
pub struct Or<FA, FB> {
    a: FA,
    b: FB,
}

impl<FA, FB> Filter for Or<FA, FB>
where
    FA: Filter,
    FB: Filter,
{
    fn filter_payload(&self, payload: &Payload) -> bool {
        self.a.filter_payload(payload) || self.b.filter_payload(payload)
    }
}

/// Filter combinator.
pub trait FilterExt
where
    Self: Sized,
{
    /// Invert a filter.
    fn not(self) -> Not<Self> {
        Not { filter: self }
    }

    /// Return a new filter that pass a payload only if self and other both pass it.
    fn and<F>(self, other: F) -> And<Self, F> {
        And { a: self, b: other }
    }

    /// Return a new filter that pass a payload if self or other pass it.
    fn or<F>(self, other: F) -> Or<Self, F> {
        Or { a: self, b: other }
    }
}

impl<T> FilterExt for T where T: Filter {}

/// Filter that will pass all payloads.
#[derive(Debug, Copy, Clone)]
pub struct All;

impl Filter for All {
    fn filter_payload(&self, _payload: &Payload) -> bool {
        true
    }
}

/// Create a filter that pass all payloads.
pub fn all() -> All {
    All
}

/// Filter that will reject all payloads.
#[derive(Debug, Copy, Clone)]
pub struct None;

impl Filter for None {
    fn filter_payload(&self, _payload: &Payload) -> bool {
        false
    }
}

/// Create a filter that will reject all payloads.
pub fn none() -> None {
    None
}

/// Filter that pass dispatch payloads with given event name.
#[derive(Debug, Clone)]
pub struct EventName {
    name: Cow<'static, str>,
}

impl Filter for EventName {
    fn filter_payload(&self, payload: &Payload) -> bool {
        payload.event_name() == Some(self.name.as_ref())
    }
}

/// Create a filter that pass dispatch payloads named `name`, like `MESSAGE_CREATE`.
pub fn event<S: Into<Cow<'static, str>>>(name: S) -> EventName {
    EventName { name: name.into() }
}

/// Filter that pass payloads with given opcode.
#[derive(Debug, Copy, Clone)]
pub struct OpcodeIs {
    opcode: Opcode,
}

impl Filter for OpcodeIs {
    fn filter_payload(&self, payload: &Payload) -> bool {
        payload.opcode() == self.opcode
    }
}

/// Create a filter that pass payloads with opcode `opcode`.
pub fn opcode(opcode: Opcode) -> OpcodeIs {
    OpcodeIs { opcode }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::ws::{event::Event, payload::Dispatch};

    fn dispatch(name: &str) -> Payload {
        Payload::Dispatch(Dispatch {
            sequence: Some(1),
            event: Event::Unknown {
                name: name.to_string(),
                data: json!({}),
            },
        })
    }

    #[test]
    fn test_filter_event_name() {
        let f = event("GUILD_CREATE");
        assert!(f.filter_payload(&dispatch("GUILD_CREATE")));
        assert!(!f.filter_payload(&dispatch("GUILD_DELETE")));
        assert!(!f.filter_payload(&Payload::Reconnect));
    }

    #[test]
    fn test_filter_combinators() {
        let guild = event("GUILD_CREATE");
        let reconnect = opcode(Opcode::Reconnect);

        let either = guild.clone().or(reconnect);
        assert!(either.filter_payload(&dispatch("GUILD_CREATE")));
        assert!(either.filter_payload(&Payload::Reconnect));
        assert!(!either.filter_payload(&Payload::HeartbeatAck(Some(1))));

        let both = guild.clone().and(opcode(Opcode::Dispatch));
        assert!(both.filter_payload(&dispatch("GUILD_CREATE")));
        assert!(!both.filter_payload(&dispatch("READY")));

        let not = guild.not();
        assert!(!not.filter_payload(&dispatch("GUILD_CREATE")));
        assert!(not.filter_payload(&Payload::Reconnect));

        assert!(all().filter_payload(&Payload::Reconnect));
        assert!(!none().filter_payload(&Payload::Reconnect));

        let closure = |p: &Payload| p.opcode() == Opcode::InvalidSession;
        assert!(closure.filter_payload(&Payload::InvalidSession(true)));
    }
}
