// Application layer: probe suites built on top of the domain rules.

pub mod suites;
