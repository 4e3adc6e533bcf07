//! ModuleLocator - import 先の決定
//!
//! 環境シグナル（bundler の有無）から import 戦略を選ぶ純粋関数です。
//! 文字列の判定はここに閉じ込め、bootstrap は `ImportTarget` だけを見ます。

use serde::{Deserialize, Serialize};

/// bundler が静的 import graph を書き換えるときに使う固定パス（パッケージルート）
pub const BUNDLED_ENTRY_PATH: &str = "../../..";

/// bundler が存在するかどうかのシグナル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundlerSignal {
    Present,
    #[default]
    Absent,
    /// 解釈できない値（entry locator にフォールバックする）
    Unrecognized,
}

impl BundlerSignal {
    /// 環境変数などの値からシグナルを読む
    ///
    /// - `"1" | "true" | "yes" | "bundler"` -> Present
    /// - 未設定, 空, `"0" | "false" | "no"` -> Absent
    /// - それ以外 -> Unrecognized
    pub fn from_env_value(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return BundlerSignal::Absent;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "bundler" => BundlerSignal::Present,
            "" | "0" | "false" | "no" => BundlerSignal::Absent,
            _ => BundlerSignal::Unrecognized,
        }
    }
}

/// import 戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportTarget {
    /// bundler が理解する固定の相対パス
    Bundled,
    /// payload の entry locator をそのまま使う
    EntryLocator,
}

impl ImportTarget {
    /// 実際に import する path
    pub fn path<'a>(&self, entry_locator: &'a str) -> &'a str {
        match self {
            ImportTarget::Bundled => BUNDLED_ENTRY_PATH,
            ImportTarget::EntryLocator => entry_locator,
        }
    }
}

/// ModuleLocator は状態を持たない
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleLocator;

impl ModuleLocator {
    pub fn new() -> Self {
        Self
    }

    /// 全域関数：bundler があるときだけ Bundled、それ以外は EntryLocator
    pub fn resolve(&self, signal: BundlerSignal) -> ImportTarget {
        match signal {
            BundlerSignal::Present => ImportTarget::Bundled,
            BundlerSignal::Absent | BundlerSignal::Unrecognized => ImportTarget::EntryLocator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::present(BundlerSignal::Present, ImportTarget::Bundled)]
    #[case::absent(BundlerSignal::Absent, ImportTarget::EntryLocator)]
    #[case::unrecognized(BundlerSignal::Unrecognized, ImportTarget::EntryLocator)]
    fn resolve_is_deterministic(#[case] signal: BundlerSignal, #[case] expected: ImportTarget) {
        let locator = ModuleLocator::new();
        assert_eq!(locator.resolve(signal), expected);
        assert_eq!(locator.resolve(signal), locator.resolve(signal));
    }

    #[rstest]
    #[case::unset(None, BundlerSignal::Absent)]
    #[case::empty(Some(""), BundlerSignal::Absent)]
    #[case::zero(Some("0"), BundlerSignal::Absent)]
    #[case::one(Some("1"), BundlerSignal::Present)]
    #[case::mixed_case(Some(" TRUE "), BundlerSignal::Present)]
    #[case::bundler(Some("bundler"), BundlerSignal::Present)]
    #[case::garbage(Some("webpack?"), BundlerSignal::Unrecognized)]
    fn signal_is_parsed_from_env_values(#[case] value: Option<&str>, #[case] expected: BundlerSignal) {
        assert_eq!(BundlerSignal::from_env_value(value), expected);
    }

    #[test]
    fn non_bundler_environment_imports_the_locator_verbatim() {
        let target = ModuleLocator::new().resolve(BundlerSignal::Absent);
        assert_eq!(target.path("./entry.js"), "./entry.js");
    }

    #[test]
    fn bundler_environment_ignores_the_locator() {
        let target = ModuleLocator::new().resolve(BundlerSignal::Present);
        assert_eq!(target.path("./entry.js"), BUNDLED_ENTRY_PATH);
    }
}
