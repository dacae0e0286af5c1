pub mod activity;
pub mod contact;
pub mod integration;
pub mod profile;
pub mod run;
pub mod sentiment;
