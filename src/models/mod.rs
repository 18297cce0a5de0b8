//! 数据模型模块
//! 与后端 API 的请求/响应结构一一对应，客户端不对其施加额外约束

pub mod admin;
pub mod auth;
pub mod booking;
pub mod favorite;
pub mod item;
