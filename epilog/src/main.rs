// Copyright 2022 The Epilog Authors

// This file is part of Epilog.

// Epilog is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Epilog is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Epilog.  If not, see <https://www.gnu.org/licenses/>.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use clap::{crate_version, Arg, Command};

use epilog_lib::Session;

fn read_file_or_exit(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Error reading {}: {}", path.display(), err);
            std::process::exit(1);
        }
    }
}

fn main() {
    let matches = Command::new("epilog")
        .version(crate_version!())
        .about("A resolution-based interpreter for a Prolog-like logic language")
        .arg(
            Arg::new("FILE")
                .help("Source files to consult, in order, before standard input")
                .multiple_values(true)
                .required(false)
                .allow_invalid_utf8(true),
        )
        .get_matches();

    let mut session = Session::new();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    if let Some(paths) = matches.values_of_os("FILE") {
        for path in paths {
            let source = read_file_or_exit(Path::new(path));
            session
                .consult(&source, &mut out, &mut err)
                .expect("Error when printing to stdout.");
        }
    }

    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        eprintln!("Error reading standard input: {}", e);
        std::process::exit(1);
    }
    session
        .consult(&source, &mut out, &mut err)
        .expect("Error when printing to stdout.");
}
