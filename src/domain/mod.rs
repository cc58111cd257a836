pub mod availability;
pub mod meeting;
pub mod reservation;
pub mod time_window;
pub mod waitlist;

pub use availability::{AvailabilityRule, BlockPeriod, NewAvailabilityRule, NewBlockPeriod};
pub use meeting::{ConfirmingParty, Meeting, MeetingOutcome, MeetingRequest, MeetingStatus};
pub use reservation::{HoldStatus, NewHold, TemporaryReservation};
pub use time_window::{SlotRange, TimeWindow};
pub use waitlist::{LeadScoring, ScoringPolicy, WaitlistCandidate, WaitlistEntry};
