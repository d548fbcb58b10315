mod common;
mod conversions_test;
mod pipeline_test;
