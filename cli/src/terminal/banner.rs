use colored::*;

use crate::terminal::print;

const BANNER_0: &str = r#"
     _   _      _   ____       _            _   _
    | \ | | ___| |_|  _ \  ___| |_ ___  ___| |_(_)_   _____
    |  \| |/ _ \ __| | | |/ _ \ __/ _ \/ __| __| \ \ / / _ \
    | |\  |  __/ |_| |_| |  __/ ||  __/ (__| |_| |\ V /  __/
    |_| \_|\___|\__|____/ \___|\__\___|\___|\__|_| \_/ \___|
"#;

const BANNER_1: &str = r#"
                  .--.
                 /.-. '----------.
                 \'-' .--"--""-"-'
                  '--'   n e t d e t e c t i v e
"#;

pub fn print() {
    let art = match rand::random_range(0..=1u8) {
        0 => BANNER_0.truecolor(255, 165, 0),
        _ => BANNER_1.green(),
    };
    print::print(&art.to_string());
}
