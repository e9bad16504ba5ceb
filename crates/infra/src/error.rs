use thiserror::Error;

/// Typed failures returned by the pairing/score/generation engine.
///
/// Conflict variants mean the caller raced a concurrent mutation or acted on
/// stale state; it should re-read and decide whether to retry. `Invariant` is
/// a programmer error: the owning transaction must abort without writing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("partner slot is already taken")]
    SlotTaken,

    #[error("pairing is not cancelled")]
    PairingNotCancelled,

    #[error("partner seat is locked by a captured payment")]
    PartnerLocked,

    #[error("invite link has expired")]
    InviteExpired,

    #[error("invite has already been used")]
    InviteAlreadyUsed,

    #[error("split payment deadline has passed")]
    SplitDeadlinePassed,

    #[error("pairing has expired")]
    PairingExpired,

    #[error("pairing is cancelled")]
    PairingCancelled,

    #[error("event is not published")]
    EventNotPublished,

    #[error("registration has not opened yet")]
    InscriptionsNotOpen,

    #[error("registration is closed")]
    InscriptionsClosed,

    #[error("tournament has already started")]
    TournamentStarted,

    #[error("registration status is terminal")]
    TerminalStatus,

    #[error("invalid registration transition: {0}")]
    InvalidTransition(String),

    #[error("actor is not the captain or organization staff")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Invalid(_) => "INVALID_INPUT",
            EngineError::SlotTaken => "SLOT_TAKEN",
            EngineError::PairingNotCancelled => "PAIRING_NOT_CANCELLED",
            EngineError::PartnerLocked => "PARTNER_LOCKED",
            EngineError::InviteExpired => "INVITE_EXPIRED",
            EngineError::InviteAlreadyUsed => "INVITE_ALREADY_USED",
            EngineError::SplitDeadlinePassed => "SPLIT_DEADLINE_PASSED",
            EngineError::PairingExpired => "PAIRING_EXPIRED",
            EngineError::PairingCancelled => "PAIRING_CANCELLED",
            EngineError::EventNotPublished => "EVENT_NOT_PUBLISHED",
            EngineError::InscriptionsNotOpen => "INSCRIPTIONS_NOT_OPEN",
            EngineError::InscriptionsClosed => "INSCRIPTIONS_CLOSED",
            EngineError::TournamentStarted => "TOURNAMENT_STARTED",
            EngineError::TerminalStatus => "TERMINAL_STATUS",
            EngineError::InvalidTransition(_) => "INVALID_TRANSITION",
            EngineError::Forbidden => "FORBIDDEN",
            EngineError::NotFound => "NOT_FOUND",
            EngineError::Invariant(_) => "INVARIANT_VIOLATED",
        }
    }

    /// Conflicts require the caller to re-read current state before retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::SlotTaken
                | EngineError::PairingNotCancelled
                | EngineError::PartnerLocked
                | EngineError::InviteExpired
                | EngineError::InviteAlreadyUsed
                | EngineError::SplitDeadlinePassed
                | EngineError::PairingExpired
                | EngineError::PairingCancelled
                | EngineError::EventNotPublished
                | EngineError::InscriptionsNotOpen
                | EngineError::InscriptionsClosed
                | EngineError::TournamentStarted
                | EngineError::TerminalStatus
                | EngineError::InvalidTransition(_)
        )
    }
}
