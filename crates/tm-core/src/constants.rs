/// Upper bound on conflict cycles enumerated per query. Past this the
/// ordering is reported as undecidable and treated as conflicting.
pub const MAX_CYCLES: usize = 10_000;
