pub mod audit;
pub mod config;
pub mod db;
pub mod dto;
pub mod email_client;
pub mod entity;
pub mod error;
pub mod invoice;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
