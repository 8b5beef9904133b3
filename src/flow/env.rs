use crate::define::Ambient;
use crate::value::Value;

/// The ambient context a flow runs under.
///
/// Method parameters bound to an [`Ambient`] receive these values directly; they never
/// appear as ports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowEnv {
    pub game: Value,
    pub card: Value,
    pub buff: Value,
    pub event: Value,
}

impl FlowEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game(mut self, game: impl Into<Value>) -> Self {
        self.game = game.into();
        self
    }

    pub fn with_card(mut self, card: impl Into<Value>) -> Self {
        self.card = card.into();
        self
    }

    pub fn with_buff(mut self, buff: impl Into<Value>) -> Self {
        self.buff = buff.into();
        self
    }

    pub fn with_event(mut self, event: impl Into<Value>) -> Self {
        self.event = event.into();
        self
    }

    /// The value bound to `ambient`. `Flow` and `Node` are handed to the body through
    /// its call and resolve to null here.
    pub fn resolve(&self, ambient: Ambient) -> Value {
        match ambient {
            Ambient::Game => self.game.clone(),
            Ambient::Card => self.card.clone(),
            Ambient::Buff => self.buff.clone(),
            Ambient::Event => self.event.clone(),
            Ambient::Flow | Ambient::Node => Value::Null,
        }
    }
}
