//! Domain-level command and query types
//! These structs are used by services inside the domain layer. The CLI is
//! responsible for turning its arguments into these types.

pub mod movements {
    use chrono::NaiveDate;
    use shared::MovementDirection;

    /// Input for creating a new movement.
    #[derive(Debug, Clone)]
    pub struct CreateMovementCommand {
        pub owner_id: String,
        pub title: String,
        pub subtitle: String,
        /// Non-negative magnitude
        pub amount: f64,
        pub direction: MovementDirection,
        /// Calendar date of the movement; `None` means now
        pub date: Option<NaiveDate>,
    }

    /// Query for one calendar month of an owner's movements.
    #[derive(Debug, Clone)]
    pub struct MonthQuery {
        pub owner_id: String,
        pub year: i32,
        /// 1-based month
        pub month: u32,
    }
}
