//! Interactive menu selecting which run to perform.

use std::io::{self, BufRead, Write};

use crate::types::TxKind;

const MENU: &str = "Choose the action you want to perform:\n\
1. Wrap (Deposit) Ethereum\n\
2. Unwrap (Withdraw) Ethereum\n\
3. Do Both (Sequential with Delay)\n\
4. Interleaving Transactions (Randomized Order)\n\
5. Exit\n\
Enter your choice (1, 2, 3, 4, or 5): ";

/// Printed when option 5 is picked
pub const FAREWELL: &str = "Looser!";

const ORDER_MENU: &str = "\nOrder of swapping to be executed:\n\
1. Wrap (Deposit) First\n\
2. Unwrap (Withdraw) First\n\
Enter the order number you want to run first: ";

/// The run picked from the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Batch {
        kind: TxKind,
        count: usize,
    },
    Sequential {
        first: TxKind,
        deposit_count: usize,
        withdraw_count: usize,
    },
    Interleave {
        deposit_count: usize,
        withdraw_count: usize,
    },
    Exit,
}

/// Why the menu ended without a runnable choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuRejection {
    InvalidChoice,
    InvalidOrder,
    InvalidCount(TxKind),
    /// Input ended before an answer was given
    Closed,
}

impl MenuRejection {
    pub fn message(&self) -> String {
        match self {
            MenuRejection::InvalidChoice => "Invalid choice.".to_string(),
            MenuRejection::InvalidOrder => "Invalid order choice.".to_string(),
            MenuRejection::InvalidCount(kind) => format!(
                "The number of {} transactions must be greater than 0.",
                match kind {
                    TxKind::Deposit => "deposit",
                    TxKind::Withdraw => "withdrawal",
                }
            ),
            MenuRejection::Closed => "No input received.".to_string(),
        }
    }
}

/// Prompts on `output` and reads answers from `input`
pub struct Menu<R, W> {
    input: R,
    output: W,
}

impl Menu<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String, MenuRejection> {
        write!(self.output, "{}", prompt).map_err(|_| MenuRejection::Closed)?;
        self.output.flush().map_err(|_| MenuRejection::Closed)?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => Err(MenuRejection::Closed),
            Ok(_) => Ok(line.trim().to_string()),
        }
    }

    fn ask_count(&mut self, prompt: &str, kind: TxKind) -> Result<usize, MenuRejection> {
        let answer = self.ask(prompt)?;
        parse_count(&answer).ok_or(MenuRejection::InvalidCount(kind))
    }

    /// Shows the menu and collects the answers for the chosen run
    pub fn prompt(&mut self) -> Result<MenuChoice, MenuRejection> {
        match self.ask(MENU)?.as_str() {
            "1" => {
                let count =
                    self.ask_count("\nHow many Wrap (Deposit) transactions to run? ", TxKind::Deposit)?;
                Ok(MenuChoice::Batch {
                    kind: TxKind::Deposit,
                    count,
                })
            }
            "2" => {
                let count = self.ask_count(
                    "\nHow many Unwrap (Withdraw) transactions to run? ",
                    TxKind::Withdraw,
                )?;
                Ok(MenuChoice::Batch {
                    kind: TxKind::Withdraw,
                    count,
                })
            }
            "3" => {
                let first = match self.ask(ORDER_MENU)?.as_str() {
                    "1" => TxKind::Deposit,
                    "2" => TxKind::Withdraw,
                    _ => return Err(MenuRejection::InvalidOrder),
                };
                let deposit_count = self.ask_count(
                    "\nHow many transactions for Wrap (Deposit) to run? ",
                    TxKind::Deposit,
                )?;
                let withdraw_count = self.ask_count(
                    "How many transactions for Unwrap (Withdraw) to run? ",
                    TxKind::Withdraw,
                )?;
                Ok(MenuChoice::Sequential {
                    first,
                    deposit_count,
                    withdraw_count,
                })
            }
            "4" => {
                let deposit_count = self.ask_count(
                    "\nHow many Wrap (Deposit) transactions to run? ",
                    TxKind::Deposit,
                )?;
                let withdraw_count = self.ask_count(
                    "How many Unwrap (Withdraw) transactions to run? ",
                    TxKind::Withdraw,
                )?;
                Ok(MenuChoice::Interleave {
                    deposit_count,
                    withdraw_count,
                })
            }
            "5" => {
                writeln!(self.output, "{}", FAREWELL).map_err(|_| MenuRejection::Closed)?;
                Ok(MenuChoice::Exit)
            }
            _ => Err(MenuRejection::InvalidChoice),
        }
    }
}

/// Parses a positive transaction count.
///
/// Fractional answers are truncated, so "2.5" runs 2 transactions. Answers that
/// truncate to 0 are rejected.
pub fn parse_count(answer: &str) -> Option<usize> {
    let value = answer
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)?;
    let count = value.trunc() as usize;
    (count > 0).then_some(count)
}
