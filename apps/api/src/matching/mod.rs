// Recruiter candidate matching.
// Job text goes through the external analyzer, is normalized into requirements,
// narrowed by a store-level prefilter and an exact education gate, then scored and
// persisted as a ranked recommendation set. Candidates shown to a recruiter always
// pass through the disclosure gate.

pub mod disclosure;
pub mod fit_score;
pub mod handlers;
pub mod jobs;
pub mod ledger;
pub mod pipeline;
pub mod prefilter;
pub mod recommendations;
pub mod requirements;
pub mod scoring;
pub mod search;
