pub mod blocks;
pub mod events;
pub mod headersync;
pub mod health;
pub mod mining;
pub mod peers;
pub mod wallet;
