use std::fmt;

use super::types::Prefix;

impl fmt::Display for Prefix {
    /// Renders `name[!user][@host]`.
    ///
    /// The `!` is also kept when the name contains `@`, when the host
    /// contains `!`, or when the name is blank and there is no host, so the
    /// output parses back to the same prefix.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bang = !self.user.is_empty()
            || self.name.contains('@')
            || self.host.contains('!')
            || (self.name.trim().is_empty() && self.host.is_empty());

        f.write_str(&self.name)?;
        if bang {
            write!(f, "!{}", self.user)?;
        }
        if !self.host.is_empty() {
            write!(f, "@{}", self.host)?;
        }
        Ok(())
    }
}
