pub mod options;
pub mod report;
pub mod run;
