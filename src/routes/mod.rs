pub mod additional_payments;
pub mod health;
pub mod leaves;
pub mod payrolls;
pub mod records;
pub mod users;
