//! Utilities for input/output.

use super::OverwriteMode;
use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tempfile::NamedTempFile;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Asks the user a yes/no question on the terminal and returns the answer.
///
/// Returns the given default answer if standard input is not a terminal.
pub fn user_says_yes(question: &str, default_is_yes: bool) -> io::Result<bool> {
    if atty::isnt(atty::Stream::Stdin) {
        return Ok(default_is_yes);
    }
    let options = if default_is_yes { "[Y/n]" } else { "[y/N]" };
    loop {
        print!("{} {} ", question, options);
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;

        match answer.trim().to_lowercase().as_str() {
            "" => return Ok(default_is_yes),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n"),
        }
    }
}

/// Determines whether the file at the given path should be written given
/// the overwrite mode, asking the user if required.
pub fn check_if_write_allowed(file_path: &Path, overwrite_mode: OverwriteMode) -> io::Result<bool> {
    if !file_path.exists() {
        return Ok(true);
    }
    match overwrite_mode {
        OverwriteMode::Always => Ok(true),
        OverwriteMode::Never => {
            eprintln!(
                "Warning: Not overwriting existing file {}",
                file_path.display()
            );
            Ok(false)
        }
        OverwriteMode::Ask => user_says_yes(
            &format!("File {} already exists, overwrite?", file_path.display()),
            false,
        ),
    }
}

/// Creates the parent directory of the given file path if it does not exist.
pub fn create_directory_if_missing(directory_path: &Path) -> io::Result<()> {
    if directory_path.as_os_str().is_empty() || directory_path.is_dir() {
        Ok(())
    } else {
        fs::create_dir_all(directory_path)
    }
}

/// Writes data to the given path by first writing to a temporary file in the
/// same directory and then moving it into place, so that a failed write never
/// leaves a partial file behind.
pub fn write_atomically<W>(file_path: &Path, write_contents: W) -> io::Result<()>
where
    W: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let directory = file_path.parent().unwrap_or_else(|| Path::new(""));
    create_directory_if_missing(directory)?;

    let directory = if directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        directory
    };
    let mut temp_file = NamedTempFile::new_in(directory)?;
    {
        let mut writer = io::BufWriter::new(temp_file.as_file_mut());
        write_contents(&mut writer)?;
        writer.flush()?;
    }
    temp_file
        .persist(file_path)
        .map_err(|err| err.error)
        .map(|_| ())
}

/// Writes the given text to a file.
pub fn write_text_file(text: &str, file_path: &Path) -> io::Result<()> {
    write_atomically(file_path, |writer| writer.write_all(text.as_bytes()))
}

/// Serializes the given data into JSON format and saves it at the given path.
#[cfg(feature = "json")]
pub fn save_data_as_json<T: Serialize>(file_path: &Path, data: &T) -> io::Result<()> {
    write_atomically(file_path, |writer| {
        serde_json::to_writer(writer, data).map_err(io::Error::from)
    })
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn atomic_write_creates_missing_directories() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("nested").join("out.txt");
        write_text_file("a,b\n1,2\n", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "a,b\n1,2\n");

        assert!(!check_if_write_allowed(&file_path, OverwriteMode::Never).unwrap());
        assert!(check_if_write_allowed(&file_path, OverwriteMode::Always).unwrap());
        assert!(check_if_write_allowed(&directory.path().join("new.txt"), OverwriteMode::Never).unwrap());
    }
}
