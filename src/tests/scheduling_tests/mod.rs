mod meeting_tests;
mod waitlist_tests;
