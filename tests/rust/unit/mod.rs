mod caching_tests;
mod pipeline_tests;
