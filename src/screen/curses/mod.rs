#[cfg(not(test))]
pub mod pancurses;

#[cfg(test)]
pub mod test_terminal;
