//! The fixed target-description document served by `qXfer:features:read`
//! (spec §4.F), and the windowed chunk delivery GDB uses to fetch it.

/// Single XML document describing the 32 integer GPRs, the 32 FPRs as a
/// `riscv_double` union, one example CSR, and the full V-extension vector
/// register file. GDB fetches this once per session, in windows.
pub const TARGET_XML: &str = concat!(
    "<?xml version=\"1.0\"?>",
    "<!DOCTYPE target SYSTEM \"gdb-target.dtd\">",
    "<target>",
    "  <architecture>riscv</architecture>",
    "<feature name=\"org.gnu.gdb.riscv.cpu\">",
    "  <reg name=\"zero\" bitsize=\"32\" type=\"int\" regnum=\"0\"/>",
    "  <reg name=\"ra\" bitsize=\"32\" type=\"code_ptr\"/>",
    "  <reg name=\"sp\" bitsize=\"32\" type=\"data_ptr\"/>",
    "  <reg name=\"gp\" bitsize=\"32\" type=\"data_ptr\"/>",
    "  <reg name=\"tp\" bitsize=\"32\" type=\"data_ptr\"/>",
    "  <reg name=\"t0\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"t1\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"t2\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"fp\" bitsize=\"32\" type=\"data_ptr\"/>",
    "  <reg name=\"s1\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a0\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a1\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a2\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a3\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a4\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a5\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a6\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"a7\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s2\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s3\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s4\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s5\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s6\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s7\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s8\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s9\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s10\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"s11\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"t3\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"t4\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"t5\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"t6\" bitsize=\"32\" type=\"int\"/>",
    "  <reg name=\"pc\" bitsize=\"32\" type=\"code_ptr\"/>",
    "</feature>",
    "<feature name=\"org.gnu.gdb.riscv.fpu\">",
    "  <union id=\"riscv_double\">",
    "    <field name=\"float\" type=\"ieee_single\"/>",
    "    <field name=\"double\" type=\"ieee_double\"/>",
    "  </union>",
    "  <reg name=\"ft0\" bitsize=\"64\" type=\"riscv_double\" regnum=\"33\"/>",
    "  <reg name=\"ft1\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft2\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft3\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft4\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft5\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft6\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft7\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs0\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs1\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa0\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa1\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa2\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa3\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa4\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa5\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa6\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fa7\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs2\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs3\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs4\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs5\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs6\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs7\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs8\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs9\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs10\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fs11\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft8\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft9\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft10\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"ft11\" bitsize=\"64\" type=\"riscv_double\"/>",
    "  <reg name=\"fcsr\" bitsize=\"32\" type=\"int\" regnum=\"68\"/>",
    "</feature>",
    "  <feature name=\"org.gnu.gdb.riscv.csr\">",
    "    <reg name=\"csr100\" bitsize=\"32\" regnum=\"110\"/>",
    "  </feature>",
    "  <feature name=\"org.gnu.gdb.riscv.vector\">",
    "    <vector id=\"bytes\" type=\"uint8\" count=\"16\"/>",
    "    <vector id=\"shorts\" type=\"uint16\" count=\"8\"/>",
    "    <vector id=\"words\" type=\"uint32\" count=\"4\"/>",
    "    <vector id=\"longs\" type=\"uint64\" count=\"2\"/>",
    "    <vector id=\"quads\" type=\"uint128\" count=\"1\"/>",
    "    <union id=\"riscv_vector\">",
    "      <field name=\"b\" type=\"bytes\"/>",
    "      <field name=\"s\" type=\"shorts\"/>",
    "      <field name=\"w\" type=\"words\"/>",
    "      <field name=\"l\" type=\"longs\"/>",
    "      <field name=\"q\" type=\"quads\"/>",
    "    </union>",
    "    <reg name=\"v0\" bitsize=\"128\" regnum=\"2000\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v1\" bitsize=\"128\" regnum=\"2001\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v2\" bitsize=\"128\" regnum=\"2002\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v3\" bitsize=\"128\" regnum=\"2003\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v4\" bitsize=\"128\" regnum=\"2004\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v5\" bitsize=\"128\" regnum=\"2005\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v6\" bitsize=\"128\" regnum=\"2006\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v7\" bitsize=\"128\" regnum=\"2007\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v8\" bitsize=\"128\" regnum=\"2008\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v9\" bitsize=\"128\" regnum=\"2009\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v10\" bitsize=\"128\" regnum=\"2010\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v11\" bitsize=\"128\" regnum=\"2011\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v12\" bitsize=\"128\" regnum=\"2012\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v13\" bitsize=\"128\" regnum=\"2013\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v14\" bitsize=\"128\" regnum=\"2014\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v15\" bitsize=\"128\" regnum=\"2015\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v16\" bitsize=\"128\" regnum=\"2016\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v17\" bitsize=\"128\" regnum=\"2017\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v18\" bitsize=\"128\" regnum=\"2018\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v19\" bitsize=\"128\" regnum=\"2019\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v20\" bitsize=\"128\" regnum=\"2020\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v21\" bitsize=\"128\" regnum=\"2021\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v22\" bitsize=\"128\" regnum=\"2022\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v23\" bitsize=\"128\" regnum=\"2023\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v24\" bitsize=\"128\" regnum=\"2024\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v25\" bitsize=\"128\" regnum=\"2025\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v26\" bitsize=\"128\" regnum=\"2026\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v27\" bitsize=\"128\" regnum=\"2027\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v28\" bitsize=\"128\" regnum=\"2028\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v29\" bitsize=\"128\" regnum=\"2029\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v30\" bitsize=\"128\" regnum=\"2030\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"v31\" bitsize=\"128\" regnum=\"2031\" type=\"riscv_vector\" group=\"vector\"/>",
    "    <reg name=\"vstart\" bitsize=\"32\" regnum=\"2032\" type=\"int\" group=\"vector\"/>",
    "    <reg name=\"vxsat\" bitsize=\"32\" regnum=\"2033\" type=\"int\" group=\"vector\"/>",
    "    <reg name=\"vxrm\" bitsize=\"32\" regnum=\"2034\" type=\"int\" group=\"vector\"/>",
    "    <reg name=\"vcsr\" bitsize=\"32\" regnum=\"2035\" type=\"int\" group=\"vector\"/>",
    "    <reg name=\"vl\" bitsize=\"32\" regnum=\"2036\" type=\"int\" group=\"vector\"/>",
    "    <reg name=\"vtype\" bitsize=\"32\" regnum=\"2037\" type=\"int\" group=\"vector\"/>",
    "    <reg name=\"vlenb\" bitsize=\"32\" regnum=\"2038\" type=\"int\" group=\"vector\"/>",
    "  </feature>",
    "</target>",
);

/// Serve the `off,len` window of [`TARGET_XML`] GDB asked for, as the
/// `m<chunk>`/`l<chunk>` payload `qXfer:features:read` expects.
///
/// The source computes the final-chunk test as
/// `requested_len >= (xml_len - off)`, which underflows (as an unsigned
/// `uint32_t` subtraction) whenever `off` exceeds the document length,
/// serving garbage instead of an empty final chunk. This clamps `off` to
/// the document length first, which removes the underflow without
/// changing behavior for any in-range request.
#[must_use]
pub fn qxfer_chunk(off: usize, len: usize) -> String {
    let xml = TARGET_XML.as_bytes();
    let off = off.min(xml.len());
    let remaining = xml.len() - off;
    if len >= remaining {
        let mut out = String::with_capacity(remaining + 1);
        out.push('l');
        out.push_str(&TARGET_XML[off..]);
        out
    } else {
        let mut out = String::with_capacity(len + 1);
        out.push('m');
        out.push_str(&TARGET_XML[off..off + len]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_window_reports_more_data_pending() {
        let chunk = qxfer_chunk(0, 20);
        assert!(chunk.starts_with('m'));
        assert_eq!(&chunk[1..], &TARGET_XML[0..20]);
    }

    #[test]
    fn window_covering_the_tail_reports_final_chunk() {
        let chunk = qxfer_chunk(0, TARGET_XML.len());
        assert!(chunk.starts_with('l'));
        assert_eq!(&chunk[1..], TARGET_XML);
    }

    #[test]
    fn offset_past_the_end_yields_an_empty_final_chunk_not_garbage() {
        let chunk = qxfer_chunk(TARGET_XML.len() + 1000, 10);
        assert_eq!(chunk, "l");
    }

    #[test]
    fn offset_at_the_exact_boundary_yields_an_empty_final_chunk() {
        let chunk = qxfer_chunk(TARGET_XML.len(), 10);
        assert_eq!(chunk, "l");
    }
}
