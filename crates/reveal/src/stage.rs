use std::fmt;

/// Reveal stages in narrative order. The derived ordering is the forward
/// direction: no transition ever produces a smaller stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Intro,
    Message,
    Question,
    Celebration,
    Contact,
}

impl Stage {
    pub const INITIAL: Stage = Stage::Intro;

    /// Stage entered when this stage's one-shot timer elapses.
    pub fn timer_target(self) -> Option<Stage> {
        match self {
            Stage::Intro => Some(Stage::Message),
            Stage::Message => Some(Stage::Question),
            Stage::Celebration => Some(Stage::Contact),
            Stage::Question | Stage::Contact => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Contact
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::Message => "message",
            Stage::Question => "question",
            Stage::Celebration => "celebration",
            Stage::Contact => "contact",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEvent {
    /// The one-shot timer owned by the given stage fired.
    TimerElapsed(Stage),
    Accept,
    Decline,
    /// Pointer hovered the decline control.
    HoverDecline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advance(Stage),
    /// Self-loop on `Question`: count, relocate and discourage.
    Decline,
    /// Relocate the decline control only.
    Evade,
    Ignored,
}

pub fn transition(stage: Stage, event: RevealEvent) -> Transition {
    match (stage, event) {
        (current, RevealEvent::TimerElapsed(owner)) if current == owner => current
            .timer_target()
            .map_or(Transition::Ignored, Transition::Advance),
        (Stage::Question, RevealEvent::Accept) => Transition::Advance(Stage::Celebration),
        (Stage::Question, RevealEvent::Decline) => Transition::Decline,
        (Stage::Question, RevealEvent::HoverDecline) => Transition::Evade,
        _ => Transition::Ignored,
    }
}

#[cfg(test)]
#[path = "tests/stage_tests.rs"]
mod tests;
