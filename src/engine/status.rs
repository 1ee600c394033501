use crate::models::{BookingStatus, Role};

impl BookingStatus {
    /// Soft state machine: pending -> accepted | rejected | cancelled,
    /// accepted -> completed | cancelled. Terminal states go nowhere.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Rejected) | (Pending, Cancelled)
                | (Accepted, Completed) | (Accepted, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

/// Status changes a screen offers to `role` for a booking in `status`.
pub fn available_actions(status: BookingStatus, role: Role) -> Vec<BookingStatus> {
    let candidates: &[BookingStatus] = match role {
        Role::Driver => &[
            BookingStatus::Accepted,
            BookingStatus::Rejected,
            BookingStatus::Completed,
        ],
        Role::Customer => &[BookingStatus::Cancelled],
        Role::Admin => &[
            BookingStatus::Accepted,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ],
    };

    candidates
        .iter()
        .copied()
        .filter(|next| status.can_transition_to(*next))
        .collect()
}
