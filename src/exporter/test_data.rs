pub const GOOD_OUTPUT: &str = "hostA, cpu, load, 0.75
hostA, mem, used, 512
hostB, net, rx_bytes, 1024
";

pub const DUPLICATED_OUTPUT: &str = "hostA,cpu,load,0.5
hostA,mem,used,512
hostA,cpu,load,0.9
";

/// Second line is missing its value.
pub const MALFORMED_OUTPUT: &str = "hostA,cpu,load,0.75
hostA,cpu,idle
hostA,mem,used,512
";
