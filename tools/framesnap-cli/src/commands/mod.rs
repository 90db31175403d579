pub mod monitors;
pub mod record;
pub mod review;
