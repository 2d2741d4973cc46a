//! Effects - side effects declared by the reducer

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Fetch two random Pokemon for a new battle
    FetchCombatants,
    /// Run the enemy's counter-attack for `session` after the turn delay
    ScheduleCounterAttack { session: u64 },
    /// Submit the enemy defeated in `session` to the capture endpoint
    SubmitCapture { session: u64, name: String },
}
