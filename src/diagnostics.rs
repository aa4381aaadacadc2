//! Operator diagnostics for the routing table.
//!
//! Diagnostic commands arrive as plain names (for example over the bus inbox
//! of the broker) and are parsed into a [`DiagnosticCommand`]. Executing a
//! command against a table yields a [`DiagnosticReport`] that is both logged
//! and returned to the caller.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

use crate::data_structures::routing_table::{
    RouteError, RoutingStats, RoutingStrategy, RoutingTable,
};

/// Errors raised by diagnostic commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticError {
    /// The command name is not recognized.
    #[error("Unknown diagnostic command: {0}")]
    UnknownCommand(String),

    /// The routing table failed to produce the requested data.
    #[error("Routing table error: {0}")]
    Route(#[from] RouteError),

    /// Log verbosity cannot be changed.
    #[error("Cannot change log verbosity: {0}")]
    Verbosity(String),
}

/// Switches the router's log output between normal and verbose levels.
#[cfg_attr(test, mockall::automock)]
pub trait VerbosityControl {
    /// Enables verbose logging when `verbose` is `true`, restores the normal
    /// level otherwise.
    fn set_verbose(&self, verbose: bool) -> Result<(), DiagnosticError>;
}

/// A named operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCommand {
    /// Log the routing table counters.
    DumpRoutingStats,
    /// Log the trie, one node per line.
    DumpRoutingTable,
    /// Log the quick-match expressions.
    DumpQuickMatchExpressions,
    /// Select a lookup strategy.
    SetStrategy(RoutingStrategy),
    /// Switch to the verbose log level.
    EnableVerboseLogs,
    /// Restore the configured log level.
    DisableVerboseLogs,
}

impl DiagnosticCommand {
    /// Every command, in help order.
    pub const ALL: [DiagnosticCommand; 8] = [
        DiagnosticCommand::DumpRoutingStats,
        DiagnosticCommand::DumpRoutingTable,
        DiagnosticCommand::DumpQuickMatchExpressions,
        DiagnosticCommand::SetStrategy(RoutingStrategy::Exhaustive),
        DiagnosticCommand::SetStrategy(RoutingStrategy::EarlyExit),
        DiagnosticCommand::SetStrategy(RoutingStrategy::QuickCache),
        DiagnosticCommand::EnableVerboseLogs,
        DiagnosticCommand::DisableVerboseLogs,
    ];

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticCommand::DumpRoutingStats => "dumpRoutingStats",
            DiagnosticCommand::DumpRoutingTable => "dumpRoutingTable",
            DiagnosticCommand::DumpQuickMatchExpressions => "dumpQuickMatchExpressions",
            DiagnosticCommand::SetStrategy(RoutingStrategy::Exhaustive) => "rStrategyNormal",
            DiagnosticCommand::SetStrategy(RoutingStrategy::EarlyExit) => "rStrategyOptimization1",
            DiagnosticCommand::SetStrategy(RoutingStrategy::QuickCache) => "rStrategyOptimization2",
            DiagnosticCommand::EnableVerboseLogs => "enableVerboseLogs",
            DiagnosticCommand::DisableVerboseLogs => "disableVerboseLogs",
        }
    }

    /// One-line description for help output.
    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticCommand::DumpRoutingStats => "dump the number of nodes and root nodes in the routing table",
            DiagnosticCommand::DumpRoutingTable => "dump the routing tree itself",
            DiagnosticCommand::DumpQuickMatchExpressions => "dump the quick-match expressions used by the quick-cache lookup",
            DiagnosticCommand::SetStrategy(RoutingStrategy::Exhaustive) => "set the routing strategy to exhaustive (slowest)",
            DiagnosticCommand::SetStrategy(RoutingStrategy::EarlyExit) => "set the routing strategy to early-exit (faster)",
            DiagnosticCommand::SetStrategy(RoutingStrategy::QuickCache) => "set the routing strategy to quick-cache (fastest, default)",
            DiagnosticCommand::EnableVerboseLogs => "enable debug level logs",
            DiagnosticCommand::DisableVerboseLogs => "restore the configured log level",
        }
    }

    /// Help text listing every command.
    pub fn help() -> String {
        DiagnosticCommand::ALL
            .iter()
            .map(|command| format!("{} - {}\n", command.name(), command.description()))
            .collect()
    }

    /// Runs the command against `table`.
    ///
    /// Verbosity commands need a `logs` handle and fail without one.
    pub fn execute<V: Clone>(
        &self,
        table: &mut RoutingTable<V>,
        logs: Option<&dyn VerbosityControl>,
    ) -> Result<DiagnosticReport, DiagnosticError> {
        info!(command = self.name(), "Executing diagnostic command");
        let report = match *self {
            DiagnosticCommand::DumpRoutingStats => DiagnosticReport::Stats(table.dump_statistics()),
            DiagnosticCommand::DumpRoutingTable => {
                let trace = table.trace_tree();
                info!("Begin routing table trace");
                for line in trace.lines() {
                    info!("{}", line);
                }
                info!("End routing table trace");
                DiagnosticReport::Tree(trace)
            }
            DiagnosticCommand::DumpQuickMatchExpressions => {
                let paths = table
                    .dump_quick_match_expressions()?
                    .iter()
                    .map(|entry| entry.path().to_string())
                    .collect();
                DiagnosticReport::QuickMatch(paths)
            }
            DiagnosticCommand::SetStrategy(strategy) => {
                table.set_strategy(strategy);
                DiagnosticReport::Strategy(strategy)
            }
            DiagnosticCommand::EnableVerboseLogs | DiagnosticCommand::DisableVerboseLogs => {
                let verbose = *self == DiagnosticCommand::EnableVerboseLogs;
                let logs = logs.ok_or_else(|| {
                    DiagnosticError::Verbosity("no log handle installed".to_string())
                })?;
                logs.set_verbose(verbose)?;
                DiagnosticReport::Verbosity(verbose)
            }
        };
        Ok(report)
    }
}

impl fmt::Display for DiagnosticCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DiagnosticCommand {
    type Err = DiagnosticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        DiagnosticCommand::ALL
            .into_iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| DiagnosticError::UnknownCommand(name.to_string()))
    }
}

/// Result of a diagnostic command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticReport {
    /// Routing table counters.
    Stats(RoutingStats),
    /// Rendered trie.
    Tree(String),
    /// Quick-match paths in scan order.
    QuickMatch(Vec<String>),
    /// Strategy now active.
    Strategy(RoutingStrategy),
    /// Whether verbose logging is now enabled.
    Verbosity(bool),
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticReport::Stats(stats) => write!(f, "{stats}"),
            DiagnosticReport::Tree(trace) => {
                writeln!(f, "Begin routing table trace:")?;
                f.write_str(trace)?;
                write!(f, "End routing table trace.")
            }
            DiagnosticReport::QuickMatch(paths) => {
                writeln!(f, "Begin quick match expressions:")?;
                for (number, path) in paths.iter().enumerate() {
                    writeln!(f, "Expression #{} {}", number + 1, path)?;
                }
                write!(f, "End quick match expressions.")
            }
            DiagnosticReport::Strategy(strategy) => write!(f, "Routing strategy set to {strategy}"),
            DiagnosticReport::Verbosity(true) => write!(f, "Verbose logs enabled"),
            DiagnosticReport::Verbosity(false) => write!(f, "Verbose logs disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use test_case::test_case;

    fn sample_table() -> RoutingTable<u32> {
        let mut table = RoutingTable::new();
        table.set_route("a.b", 1).unwrap();
        table.set_route("a.c", 2).unwrap();
        table
    }

    #[test_case("dumpRoutingStats", DiagnosticCommand::DumpRoutingStats)]
    #[test_case("dumpRoutingTable", DiagnosticCommand::DumpRoutingTable)]
    #[test_case("dumpQuickMatchExpressions", DiagnosticCommand::DumpQuickMatchExpressions)]
    #[test_case("rStrategyNormal", DiagnosticCommand::SetStrategy(RoutingStrategy::Exhaustive))]
    #[test_case("rStrategyOptimization1", DiagnosticCommand::SetStrategy(RoutingStrategy::EarlyExit))]
    #[test_case("rStrategyOptimization2", DiagnosticCommand::SetStrategy(RoutingStrategy::QuickCache))]
    #[test_case("enableVerboseLogs", DiagnosticCommand::EnableVerboseLogs)]
    #[test_case(" disableVerboseLogs\n", DiagnosticCommand::DisableVerboseLogs)]
    fn test_parse_command(name: &str, expected: DiagnosticCommand) {
        let command: DiagnosticCommand = name.parse().unwrap();
        assert_eq!(command, expected);
        assert_eq!(command.to_string(), name.trim());
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            "enableTrafficMonitor".parse::<DiagnosticCommand>(),
            Err(DiagnosticError::UnknownCommand("enableTrafficMonitor".to_string()))
        );
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = DiagnosticCommand::help();
        assert_eq!(help.lines().count(), DiagnosticCommand::ALL.len());
        assert!(help.contains("rStrategyOptimization2 - "));
    }

    #[test]
    fn test_dump_commands() {
        let mut table = sample_table();

        let report = DiagnosticCommand::DumpRoutingStats.execute(&mut table, None).unwrap();
        match report {
            DiagnosticReport::Stats(stats) => {
                assert_eq!(stats.root_nodes, 1);
                assert_eq!(stats.dynamic_nodes, 2);
            }
            other => panic!("unexpected report {other:?}"),
        }

        let report = DiagnosticCommand::DumpRoutingTable.execute(&mut table, None).unwrap();
        assert!(report.to_string().contains("    <a.> children:2 optimized? N"));

        let report = DiagnosticCommand::DumpQuickMatchExpressions
            .execute(&mut table, None)
            .unwrap();
        assert_eq!(
            report,
            DiagnosticReport::QuickMatch(vec!["a.c".to_string(), "a.b".to_string()])
        );
        assert!(report.to_string().contains("Expression #1 a.c"));
    }

    #[test]
    fn test_strategy_command() {
        let mut table = sample_table();
        let report = "rStrategyOptimization1"
            .parse::<DiagnosticCommand>()
            .unwrap()
            .execute(&mut table, None)
            .unwrap();
        assert_eq!(report, DiagnosticReport::Strategy(RoutingStrategy::EarlyExit));
        assert_eq!(table.strategy(), RoutingStrategy::EarlyExit);
    }

    #[test]
    fn test_verbosity_commands() {
        let mut table = sample_table();
        let mut logs = MockVerbosityControl::new();
        logs.expect_set_verbose()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        logs.expect_set_verbose()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));

        let report = DiagnosticCommand::EnableVerboseLogs
            .execute(&mut table, Some(&logs))
            .unwrap();
        assert_eq!(report, DiagnosticReport::Verbosity(true));
        let report = DiagnosticCommand::DisableVerboseLogs
            .execute(&mut table, Some(&logs))
            .unwrap();
        assert_eq!(report.to_string(), "Verbose logs disabled");
    }

    #[test]
    fn test_verbosity_without_handle() {
        let mut table = sample_table();
        assert!(matches!(
            DiagnosticCommand::EnableVerboseLogs.execute(&mut table, None),
            Err(DiagnosticError::Verbosity(_))
        ));
    }
}
