mod assessment_tests;
mod auth_tests;
mod common;
mod interview_tests;
mod roadmap_tests;
