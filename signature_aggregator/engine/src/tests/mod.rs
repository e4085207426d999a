mod support;

mod audit_log_tests;
mod directory_test;
