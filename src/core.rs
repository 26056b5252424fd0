pub mod advisor;
pub mod hour_range;
pub mod report;
pub mod series;
pub mod window;
