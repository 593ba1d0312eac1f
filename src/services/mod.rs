pub mod daily_push;
