pub mod input;
pub mod line_editor;
#[cfg(test)]
pub mod test_utils;
pub mod url;
