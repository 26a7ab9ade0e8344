mod api_tests;
mod coordinator_tests;
mod crawl_tests;
mod fetch_tests;
