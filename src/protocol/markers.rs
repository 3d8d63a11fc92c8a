//! Reserved control tokens and sampled-token classification

pub const END_OF_TEXT: &str = "<|endoftext|>";
pub const ME: &str = "<|Me|>";
pub const THEM: &str = "<|Them|>";
pub const CONVERSATION_START: &str = "<|ConversationStart|>";

/// Every reserved token, in vocabulary order
pub const CONTROL_TOKENS: [&str; 10] = [
    END_OF_TEXT,
    ME,
    THEM,
    CONVERSATION_START,
    "<|Loved|>",
    "<|Liked|>",
    "<|Laughed at|>",
    "<|Disliked|>",
    "<|Questioned|>",
    "<|Emphasized|>",
];

/// Marker that says whose turn follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMarker {
    Me,
    Them,
    ConversationStart,
    EndOfText,
}

impl TurnMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnMarker::Me => ME,
            TurnMarker::Them => THEM,
            TurnMarker::ConversationStart => CONVERSATION_START,
            TurnMarker::EndOfText => END_OF_TEXT,
        }
    }

    /// Whether the replying party keeps the floor
    pub fn continues_turn(self) -> bool {
        self == TurnMarker::Me
    }
}

/// Single-token acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Loved,
    Liked,
    LaughedAt,
    Disliked,
    Questioned,
    Emphasized,
}

impl Reaction {
    pub const ALL: [Reaction; 6] = [
        Reaction::Loved,
        Reaction::Liked,
        Reaction::LaughedAt,
        Reaction::Disliked,
        Reaction::Questioned,
        Reaction::Emphasized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::Loved => "<|Loved|>",
            Reaction::Liked => "<|Liked|>",
            Reaction::LaughedAt => "<|Laughed at|>",
            Reaction::Disliked => "<|Disliked|>",
            Reaction::Questioned => "<|Questioned|>",
            Reaction::Emphasized => "<|Emphasized|>",
        }
    }
}

/// What a decoded token means to the turn protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClass {
    Boundary(TurnMarker),
    Reaction(Reaction),
    Text(String),
}

/// Classify a decoded token by exact string match
pub fn classify(token: &str) -> TokenClass {
    match token {
        ME => TokenClass::Boundary(TurnMarker::Me),
        THEM => TokenClass::Boundary(TurnMarker::Them),
        CONVERSATION_START => TokenClass::Boundary(TurnMarker::ConversationStart),
        END_OF_TEXT => TokenClass::Boundary(TurnMarker::EndOfText),
        other => Reaction::ALL
            .into_iter()
            .find(|r| r.as_str() == other)
            .map_or_else(|| TokenClass::Text(other.to_string()), TokenClass::Reaction),
    }
}

/// Whether a decoded token ends a sampled reply
pub fn is_turn_boundary(token: &str) -> bool {
    matches!(classify(token), TokenClass::Boundary(_))
}

/// First reserved token spelled out anywhere in `text`
pub fn find_reserved(text: &str) -> Option<&'static str> {
    CONTROL_TOKENS.into_iter().find(|token| text.contains(token))
}

/// Remove every reserved token spelled out inside free text.
///
/// Repeats until none is left: cutting one out can join the halves of another.
pub fn strip_reserved(text: &str) -> String {
    let mut clean = text.to_string();
    while let Some(token) = find_reserved(&clean) {
        clean = clean.replace(token, "");
    }
    clean
}

/// Canonical single-message prompt used by the explorer and candidate generation
pub fn wrap_prompt(text: &str) -> String {
    format!("{CONVERSATION_START}{THEM}{text}{ME}")
}
