//! `log`: print the tail of a site's logs, optionally following them.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::cli::LogArgs;
use crate::error::CliError;

use super::{Context, SiteController, util};

const FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

pub fn handle(
    controller: &SiteController,
    args: &LogArgs,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let logs = controller.logs(&domain)?;
    let paths = match (args.access, args.error) {
        (true, _) => vec![logs.access],
        (_, true) => vec![logs.error],
        _ => vec![logs.access, logs.error],
    };
    let headers = paths.len() > 1;

    let mut open = Vec::new();
    let mut stdout = io::stdout().lock();
    for path in paths {
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                ctx.status
                    .warn(&format!("{} does not exist yet", path.display()));
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        if headers {
            writeln!(stdout, "==> {} <==", path.display())?;
        }
        for line in last_lines(&mut reader, args.lines)? {
            writeln!(stdout, "{line}")?;
        }
        open.push((path, reader));
    }
    stdout.flush()?;
    drop(stdout);

    if args.follow {
        follow(&mut open, headers)?;
    }
    Ok(())
}

/// Read `reader` to the end, keeping the last `n` lines.
fn last_lines(reader: &mut impl BufRead, n: usize) -> io::Result<VecDeque<String>> {
    let mut tail = VecDeque::with_capacity(n);
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        if n > 0 {
            if tail.len() == n {
                tail.pop_front();
            }
            tail.push_back(line.trim_end_matches(['\n', '\r']).to_owned());
        }
        line.clear();
    }
    Ok(tail)
}

/// Print whatever gets appended until the process is interrupted.
fn follow(open: &mut [(PathBuf, BufReader<File>)], headers: bool) -> Result<(), CliError> {
    debug!(files = open.len(), "following logs");
    let mut last: Option<PathBuf> = None;
    loop {
        for (path, reader) in open.iter_mut() {
            let mut chunk = String::new();
            reader.read_to_string(&mut chunk)?;
            if chunk.is_empty() {
                continue;
            }
            let mut stdout = io::stdout().lock();
            if headers && last.as_deref() != Some(path.as_path()) {
                writeln!(stdout, "\n==> {} <==", path.display())?;
                last = Some(path.clone());
            }
            write!(stdout, "{chunk}")?;
            stdout.flush()?;
        }
        thread::sleep(FOLLOW_INTERVAL);
    }
}
