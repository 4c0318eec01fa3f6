/// What the user asked for at the prompt
#[derive(Debug, PartialEq)]
pub enum Input {
    /// Ask the user for input again
    AskAgain,
    Query(String),
    Exit,
}

pub fn parse_input(line: &str) -> Input {
    let text = line.trim();
    if text.is_empty() {
        Input::AskAgain
    } else if text.eq_ignore_ascii_case("quit")
        || text.eq_ignore_ascii_case("/quit")
        || text.eq_ignore_ascii_case("/exit")
    {
        Input::Exit
    } else {
        Input::Query(text.to_string())
    }
}
