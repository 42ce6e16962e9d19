mod dispatch;
mod requests;
mod timer;
