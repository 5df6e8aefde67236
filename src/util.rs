pub fn str_n(prefix: &str, n: usize) -> String {
	let mut s = String::from(prefix);
	s.push_str(&n.to_string());
	s
}

pub const fn align_up(v: usize, multiple: usize) -> usize {
	if multiple == 0 {
		v
	} else {
		let remainder = v % multiple;
		if remainder == 0 {
			v
		} else {
			v + multiple - remainder
		}
	}
}
