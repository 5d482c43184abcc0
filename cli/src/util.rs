pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line offsets of a listing.
pub struct SourceMeta {
    line_starts: Vec<usize>,
    len: usize,
}

impl SourceMeta {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn byte_index_to_position(&self, index: usize) -> anyhow::Result<Position> {
        anyhow::ensure!(index <= self.len, "Source index out of range: {index}");

        // Index of the last line starting at or before `index`
        let line = self
            .line_starts
            .partition_point(|&start| start <= index)
            .saturating_sub(1);

        let first_char_pos = self.line_starts[line];
        let last_char_pos = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.len);

        Ok(Position {
            line,
            character: index - first_char_pos,
            first_char_pos,
            last_char_pos,
        })
    }
}

#[derive(Default)]
pub struct Position {
    pub line: usize,
    pub character: usize,
    pub first_char_pos: usize,
    pub last_char_pos: usize,
}

pub struct ArgsOrVersion<T>(pub T);

impl<T: argh::FromArgs> argh::TopLevelCommand for ArgsOrVersion<T> {}

impl<T: argh::FromArgs> argh::FromArgs for ArgsOrVersion<T> {
    fn from_args(command_name: &[&str], args: &[&str]) -> Result<Self, argh::EarlyExit> {
        /// Also use argh for catching `--version`-only invocations
        #[derive(Debug, argh::FromArgs)]
        struct Version {
            /// print version information and exit
            #[argh(switch, short = 'v')]
            pub version: bool,
        }

        match Version::from_args(command_name, args) {
            Ok(v) if v.version => Err(argh::EarlyExit {
                output: format!("{} {}", command_name.first().unwrap_or(&""), VERSION),
                status: Ok(()),
            }),
            Err(exit) if exit.status.is_ok() => {
                let help = match T::from_args(command_name, &["--help"]) {
                    Ok(_) => String::new(),
                    Err(exit) => exit.output,
                };
                Err(argh::EarlyExit {
                    output: format!("{help}  -v, --version     print version information and exit"),
                    status: Ok(()),
                })
            }
            _ => T::from_args(command_name, args).map(Self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() -> anyhow::Result<()> {
        let meta = SourceMeta::new("NOP\n  PUSH1\nRET");

        let pos = meta.byte_index_to_position(0)?;
        assert_eq!((pos.line, pos.character), (0, 0));

        let pos = meta.byte_index_to_position(6)?;
        assert_eq!((pos.line, pos.character), (1, 2));
        assert_eq!((pos.first_char_pos, pos.last_char_pos), (4, 12));

        let pos = meta.byte_index_to_position(15)?;
        assert_eq!((pos.line, pos.character), (2, 3));

        assert!(meta.byte_index_to_position(16).is_err());
        Ok(())
    }
}
