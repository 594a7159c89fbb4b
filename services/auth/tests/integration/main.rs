
mod api_test;
mod session_test;
mod user_test;
