//! App - アプリケーション層
//!
//! このモジュールは、ports と queue を組み合わせてシミュレーションを実装します。
//!
//! # 主要コンポーネント
//! - **SimulationBuilder**: 構築とワイヤリング（fail-fast）
//! - **Simulation**: coordinator（cancel → producer barrier → close → consumer barrier）
//! - **supervise**: slot ごとの fault barrier（panic → restart）
//! - **Producer**: tick ごとに Reading を queue に送る
//! - **Aggregator**: queue の唯一の reader（drain-to-completion）
//! - **PublisherLoop**: fan-out queue から broker へ publish

pub mod aggregator;
pub mod builder;
pub mod coordinator;
pub mod producer;
pub mod publisher_loop;
pub mod status;
pub mod supervisor;

// 主要な型を再エクスポート
pub use self::aggregator::{Aggregator, AggregatorReport};
pub use self::builder::{BuildError, SimulationBuilder};
pub use self::coordinator::Simulation;
pub use self::producer::Producer;
pub use self::publisher_loop::{PublisherLoop, PublisherReport};
pub use self::status::SimReport;
pub use self::supervisor::{SlotContext, supervise};
