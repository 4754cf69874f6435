/*
 * Responsibility
 * - ドメインサービス (handler / middleware から呼ばれる)
 */
pub mod auth;
