// Command-line surface of `toolsuite`.

pub mod cmd_enums;
