pub mod interventions;
pub mod run;
pub mod state;
