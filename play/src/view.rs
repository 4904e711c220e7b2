use tictactoe::{Board, Error, GameView, Marker, Outcome};

/// Prints the game to stdout.
pub struct ConsoleView {
    x_name: String,
    o_name: String,
    /// Whether to print the board before every move.
    verbose: bool,
}

impl ConsoleView {
    pub fn new(x_name: &str, o_name: &str) -> Self {
        ConsoleView {
            x_name: x_name.to_owned(),
            o_name: o_name.to_owned(),
            verbose: true,
        }
    }

    /// Only prints finished games.
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    fn name(&self, marker: Marker) -> &str {
        match marker {
            Marker::X => &self.x_name,
            Marker::O => &self.o_name,
        }
    }
}

impl GameView for ConsoleView {
    fn show_board(&mut self, board: &Board, to_move: Marker) {
        if self.verbose {
            println!("\n{}\n", board);
            println!("{}'s turn ({})", self.name(to_move), to_move);
        }
    }

    fn show_error(&mut self, player: &str, error: &Error, _board: &Board) {
        println!("{}: {}. Try again.", player, error);
    }

    fn show_result(&mut self, board: &Board, outcome: Outcome) {
        println!("\n{}\n", board);
        match outcome.winner() {
            Some(marker) => println!("{} ({}) wins!", self.name(marker), marker),
            None => println!("It's a draw!"),
        }
    }
}
